use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aura")]
#[command(about = "原材料リストをAIで読み解くヘルス・コパイロット", long_about = None)]
pub struct Cli {
    /// 省略時は対話モード
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 1回だけ解析して結果を表示
    Scan {
        /// 成分表示ラベルの写真
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// 成分リスト（テキスト）
        #[arg(short, long, conflicts_with = "text_file")]
        text: Option<String>,

        /// 成分リストのファイル（`-` で標準入力）
        #[arg(long)]
        text_file: Option<PathBuf>,

        /// 確認質問への回答（結果に対して再解析する）
        #[arg(short, long)]
        answer: Option<String>,

        /// 解析結果をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 対話モードで起動
    Interactive,

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// モデル名を設定
        #[arg(long)]
        set_model: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
