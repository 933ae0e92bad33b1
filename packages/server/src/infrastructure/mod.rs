//! Infrastructure layer
//!
//! ## 概要
//!
//! ソケットと共有状態の具体的な実装を提供します。
//!
//! - `listener`: リスニングソケットの生成（バッファサイズ、バックログ）
//! - `queue`: 送信待ちメッセージのログ（呼び出し側とワーカーで共有）
//! - `registry`: 接続中クライアントの管理（ワーカー専有）

pub mod listener;
pub mod queue;
pub mod registry;

pub use queue::{MessageSender, OutboundQueue};
pub use registry::{ClientConnection, ClientRegistry, Inbound};
