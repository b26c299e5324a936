//! ローカル入力の読み込み
//!
//! 画像ファイルはData URLにエンコードしてから解析入力に載せる。
//! デコードや縮小は行わない。

use crate::error::{AuraError, Result};
use base64::{engine::general_purpose, Engine as _};
use std::io::Read;
use std::path::Path;

/// 拡張子 → MIMEタイプ
const IMAGE_MIME_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
];

fn known_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    IMAGE_MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// 拡張子からMIMEタイプを推定（不明ならJPEG扱い）
pub fn mime_type_for(path: &Path) -> &'static str {
    known_mime_type(path).unwrap_or(aura_common::prompts::DEFAULT_IMAGE_MIME)
}

/// 画像の拡張子を持つパスか
pub fn has_image_extension(path: &Path) -> bool {
    known_mime_type(path).is_some()
}

/// バイト列をData URLに変換
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// 画像ファイルを読み込んでData URLを返す
pub fn load_image_data_url(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(AuraError::FileNotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "画像読み込み");
    Ok(to_data_url(mime_type_for(path), &bytes))
}

/// 成分リストをファイルから読み込む（`-` は標準入力）
pub fn read_text_source(path: &Path) -> Result<String> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        if !path.is_file() {
            return Err(AuraError::FileNotFound(path.display().to_string()));
        }
        std::fs::read_to_string(path)?
    };
    Ok(text.trim().to_string())
}
