use aura_copilot::{app, cli, client, config, error, input, render};
use aura_common::{AnalysisInput, Event, SessionState, View};
use clap::Parser;
use cli::{Cli, Commands};
use client::GeminiClient;
use config::Config;
use error::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Scan { image, text, text_file, answer, json } => {
            let mut patch = AnalysisInput::default();
            if let Some(path) = image {
                patch.image = Some(input::load_image_data_url(&path)?);
            }
            patch.text = match text_file {
                Some(path) => Some(input::read_text_source(&path)?),
                None => text,
            };

            let client = GeminiClient::from_config(&config);
            let mut session = app::Session::new(client).with_progress(!json);

            session.dispatch(Event::Submit(patch)).await;
            if let Some(answer) = answer {
                if session.state().view == View::Reasoning {
                    session.dispatch(Event::Refine(answer)).await;
                }
            }

            let state = session.into_state();
            print_scan_result(&state, json)?;

            if state.view == View::Error || state.error.is_some() {
                std::process::exit(1);
            }
        }

        Commands::Interactive => {
            println!("🌿 Aura - ingredient co-pilot");
            let client = GeminiClient::from_config(&config);
            app::run_interactive(client).await?;
        }

        Commands::Config { set_api_key, set_model, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if let Some(model) = set_model {
                config.set_model(model)?;
                println!("✔ モデルを設定しました");
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  エンドポイント: {}", config.endpoint);
                println!("  temperature: {}", config.temperature);
                println!(
                    "  APIキー: {}",
                    if config.resolve_api_key().is_empty() { "未設定" } else { "設定済み" }
                );
            }
        }
    }

    Ok(())
}

fn print_scan_result(state: &SessionState, json: bool) -> Result<()> {
    if !json {
        println!("{}", render::render(state));
        return Ok(());
    }

    if let Some(message) = &state.error {
        eprintln!("✗ {}", message);
    }
    if let (View::Reasoning, Some(analysis)) = (state.view, &state.analysis) {
        println!("{}", serde_json::to_string_pretty(analysis)?);
    }
    Ok(())
}

/// ログ初期化（RUST_LOG 優先、出力は標準エラー）
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "aura=debug,aura_copilot=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
