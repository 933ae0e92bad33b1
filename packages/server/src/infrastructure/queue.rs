//! Outbound message log
//!
//! ## 責務
//!
//! - 送信待ちメッセージを挿入順に保持する
//! - クライアントごとのカーソルに応じて未送信メッセージを払い出す
//! - 全対象クライアントに渡ったメッセージを expired にし、次の enqueue で掃除する
//!
//! ## 設計ノート
//!
//! 1 つの `expired` フラグを全クライアントで共有すると、最初に送信できた
//! クライアントだけがメッセージを受け取ることになります。そこでログ全体は
//! 共有しつつ、各クライアントは自分の読み出し位置（cursor）を持ちます。
//! メッセージが expired になるのは、接続中の全対象クライアントのカーソルが
//! そのメッセージを通過したときだけです。
//!
//! ロックは enqueue / drain / expire の間だけ保持し、ソケット操作の間は
//! 保持しません。

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{ClientId, PendingMessage};

/// Ordered log of outbound messages with per-entry expiry
#[derive(Debug, Default)]
pub struct OutboundQueue {
    entries: VecDeque<PendingMessage>,
    next_seq: u64,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweep expired entries, then append a new one
    pub fn enqueue(&mut self, payload: String, target: Option<ClientId>) {
        self.sweep_expired();

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .push_back(PendingMessage::new(seq, payload, target));
    }

    /// Cursor a newly accepted client starts at: the oldest live entry
    pub fn first_pending(&self) -> u64 {
        self.entries
            .iter()
            .find(|entry| !entry.expired)
            .map_or(self.next_seq, |entry| entry.seq)
    }

    /// Take every live entry at or after `cursor` addressed to `client`.
    ///
    /// Returns the payloads in insertion order and the advanced cursor.
    /// Returned entries are marked delivered.
    pub fn drain_for(&mut self, client: ClientId, cursor: u64) -> (Vec<String>, u64) {
        let mut payloads = Vec::new();

        for entry in self.entries.iter_mut() {
            if entry.seq < cursor || entry.expired || !entry.is_addressed_to(client) {
                continue;
            }
            entry.delivered = true;
            payloads.push(entry.payload.clone());
        }

        (payloads, self.next_seq.max(cursor))
    }

    /// Expire entries every intended recipient has moved past.
    ///
    /// `cursors` holds the cursor of each connected client. A broadcast entry
    /// expires once it was delivered at least once and all cursors are past
    /// it. A targeted entry expires once its target is past it or gone.
    pub fn expire_delivered(&mut self, cursors: &HashMap<ClientId, u64>) {
        let min_cursor = cursors.values().copied().min();

        for entry in self.entries.iter_mut().filter(|entry| !entry.expired) {
            entry.expired = match entry.target {
                None => entry.delivered && min_cursor.is_none_or(|min| min > entry.seq),
                Some(target) => cursors.get(&target).is_none_or(|&cursor| cursor > entry.seq),
            };
        }
    }

    /// Number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries not yet expired
    pub fn live_len(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.expired).count()
    }

    fn sweep_expired(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.expired);
        let swept = before - self.entries.len();
        if swept > 0 {
            tracing::trace!("Swept {} expired messages", swept);
        }
    }
}

/// Shared handle to an `OutboundQueue`.
///
/// Cheap to clone; every clone enqueues into the same log, so producers on
/// any thread can send while the server runs.
#[derive(Debug, Clone, Default)]
pub struct MessageSender {
    queue: Arc<Mutex<OutboundQueue>>,
}

impl MessageSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for every connected client
    pub fn send(&self, message: impl Into<String>) {
        self.lock().enqueue(message.into(), None);
    }

    /// Queue a message for a single client
    pub fn send_to(&self, client: ClientId, message: impl Into<String>) {
        self.lock().enqueue(message.into(), Some(client));
    }

    /// Number of entries currently held, expired ones included
    pub fn pending_messages(&self) -> usize {
        self.lock().len()
    }

    /// Lock the underlying queue.
    ///
    /// A poisoned lock is recovered: the queue has no invariant a panicking
    /// holder could break halfway.
    pub(crate) fn lock(&self) -> MutexGuard<'_, OutboundQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - OutboundQueue のカーソル単位の払い出しと expire 判定
    // - enqueue 時の掃除
    // - MessageSender の並行 enqueue
    //
    // 【なぜこのテストが必要か】
    // - ブロードキャストが全クライアントに届くかどうかはこのモジュールで決まる
    // - expired のメッセージが再送されないことを保証する必要がある
    // ========================================

    fn cursors(entries: &[(u64, u64)]) -> HashMap<ClientId, u64> {
        entries
            .iter()
            .map(|&(id, cursor)| (ClientId::new(id), cursor))
            .collect()
    }

    #[test]
    fn test_drain_returns_messages_in_insertion_order() {
        // テスト項目: 未送信メッセージが挿入順に払い出される
        // given (前提条件):
        let mut queue = OutboundQueue::new();
        queue.enqueue("m1".to_string(), None);
        queue.enqueue("m2".to_string(), None);
        queue.enqueue("m3".to_string(), None);

        // when (操作):
        let (payloads, cursor) = queue.drain_for(ClientId::new(1), queue.first_pending());

        // then (期待する結果):
        assert_eq!(payloads, vec!["m1", "m2", "m3"]);
        assert_eq!(cursor, 3);
    }

    #[test]
    fn test_drain_skips_messages_before_cursor() {
        // テスト項目: カーソルより前のメッセージは再度払い出されない
        // given (前提条件):
        let mut queue = OutboundQueue::new();
        queue.enqueue("m1".to_string(), None);
        let (_, cursor) = queue.drain_for(ClientId::new(1), 0);
        queue.enqueue("m2".to_string(), None);

        // when (操作):
        let (payloads, next) = queue.drain_for(ClientId::new(1), cursor);

        // then (期待する結果):
        assert_eq!(payloads, vec!["m2"]);
        assert_eq!(next, 2);
    }

    #[test]
    fn test_broadcast_expires_only_after_every_client_passed() {
        // テスト項目: 全クライアントに渡るまでブロードキャストは expire しない
        // given (前提条件):
        let mut queue = OutboundQueue::new();
        queue.enqueue("broadcast".to_string(), None);
        let (_, alice_cursor) = queue.drain_for(ClientId::new(1), 0);

        // when (操作):
        queue.expire_delivered(&cursors(&[(1, alice_cursor), (2, 0)]));

        // then (期待する結果):
        assert_eq!(queue.live_len(), 1);
        let (payloads, bob_cursor) = queue.drain_for(ClientId::new(2), 0);
        assert_eq!(payloads, vec!["broadcast"]);

        queue.expire_delivered(&cursors(&[(1, alice_cursor), (2, bob_cursor)]));
        assert_eq!(queue.live_len(), 0);
    }

    #[test]
    fn test_undelivered_broadcast_survives_without_clients() {
        // テスト項目: 誰にも渡っていないメッセージはクライアント不在でも残る
        // given (前提条件):
        let mut queue = OutboundQueue::new();
        queue.enqueue("early".to_string(), None);

        // when (操作):
        queue.expire_delivered(&HashMap::new());

        // then (期待する結果):
        assert_eq!(queue.live_len(), 1);
        assert_eq!(queue.first_pending(), 0);
    }

    #[test]
    fn test_expired_messages_are_never_drained_again() {
        // テスト項目: expired のメッセージは新しいクライアントにも払い出されない
        // given (前提条件):
        let mut queue = OutboundQueue::new();
        queue.enqueue("old".to_string(), None);
        let (_, cursor) = queue.drain_for(ClientId::new(1), 0);
        queue.expire_delivered(&cursors(&[(1, cursor)]));

        // when (操作):
        let (payloads, _) = queue.drain_for(ClientId::new(2), 0);

        // then (期待する結果):
        assert!(payloads.is_empty());
        assert_eq!(queue.first_pending(), 1);
    }

    #[test]
    fn test_enqueue_sweeps_expired_entries_only() {
        // テスト項目: enqueue 時に expired のエントリだけが削除される
        // given (前提条件):
        let mut queue = OutboundQueue::new();
        queue.enqueue("sent".to_string(), None);
        let (_, cursor) = queue.drain_for(ClientId::new(1), 0);
        queue.expire_delivered(&cursors(&[(1, cursor)]));
        queue.enqueue("waiting".to_string(), Some(ClientId::new(9)));
        assert_eq!(queue.len(), 1);

        // when (操作):
        queue.enqueue("next".to_string(), None);

        // then (期待する結果):
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.live_len(), 2);
    }

    #[test]
    fn test_targeted_message_reaches_only_its_target() {
        // テスト項目: 宛先付きメッセージは宛先のクライアントだけに払い出される
        // given (前提条件):
        let mut queue = OutboundQueue::new();
        queue.enqueue("secret".to_string(), Some(ClientId::new(2)));

        // when (操作):
        let (for_alice, alice_cursor) = queue.drain_for(ClientId::new(1), 0);
        queue.expire_delivered(&cursors(&[(1, alice_cursor), (2, 0)]));
        let (for_bob, bob_cursor) = queue.drain_for(ClientId::new(2), 0);
        queue.expire_delivered(&cursors(&[(1, alice_cursor), (2, bob_cursor)]));

        // then (期待する結果):
        assert!(for_alice.is_empty());
        assert_eq!(for_bob, vec!["secret"]);
        assert_eq!(queue.live_len(), 0);
    }

    #[test]
    fn test_targeted_message_for_absent_client_expires() {
        // テスト項目: 接続していない宛先へのメッセージは expire される
        // given (前提条件):
        let mut queue = OutboundQueue::new();
        queue.enqueue("lost".to_string(), Some(ClientId::new(5)));

        // when (操作):
        queue.expire_delivered(&cursors(&[(1, 0)]));

        // then (期待する結果):
        assert_eq!(queue.live_len(), 0);
    }

    #[test]
    fn test_concurrent_sends_are_all_recorded() {
        // テスト項目: 複数スレッドからの同時送信でキューが壊れない
        // given (前提条件):
        let sender = MessageSender::new();
        let threads = 8;
        let per_thread = 250;

        // when (操作):
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let sender = sender.clone();
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        sender.send(format!("{}-{}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // then (期待する結果):
        assert_eq!(sender.pending_messages(), threads * per_thread);
        let (payloads, _) = sender.lock().drain_for(ClientId::new(1), 0);
        assert_eq!(payloads.len(), threads * per_thread);
    }
}
