//! Chat message routing.

/// What a user is asking for in a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Wants to upload a new export file
    Upload,
    /// Wants advice on their latest summary
    Diagnose,
    Unknown,
}

pub const UPLOAD_TRIGGER: &str = "家計ファイルをアップロードしたい";
pub const DIAGNOSE_TRIGGER: &str = "家計診断をお願いします";

pub fn route_message(text: &str) -> Intent {
    match text.trim() {
        UPLOAD_TRIGGER => Intent::Upload,
        DIAGNOSE_TRIGGER => Intent::Diagnose,
        _ => Intent::Unknown,
    }
}
