#[cfg(test)]
mod tests {
    use crate::timers::{TimerQueue, TimerTask};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::Instant;

    #[test]
    fn test_fires_in_due_then_schedule_order() {
        let mut queue = TimerQueue::new();
        let now = Instant::now();
        let late = queue.schedule_at(now + Duration::from_millis(20), TimerTask::Script);
        let first = queue.schedule_at(now, TimerTask::Script);
        let second = queue.schedule_at(now, TimerTask::Script);

        let horizon = now + Duration::from_millis(50);
        let order: Vec<_> = std::iter::from_fn(|| queue.pop_due(horizon).map(|timer| timer.id)).collect();
        assert_eq!(order, vec![first, second, late]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_due_respects_deadline() {
        let mut queue = TimerQueue::new();
        let now = Instant::now();
        queue.schedule_at(now + Duration::from_secs(60), TimerTask::Script);
        assert!(queue.pop_due(now).is_none());
        assert_eq!(queue.next_due(), Some(now + Duration::from_secs(60)));
    }

    #[test]
    fn test_cancel() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule(Duration::ZERO, TimerTask::Script);
        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert!(queue.pop_due(Instant::now() + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut queue = TimerQueue::new();
        let a = queue.schedule(Duration::ZERO, TimerTask::Script);
        let b = queue.schedule(Duration::ZERO, TimerTask::Script);
        assert_ne!(a, b);
        assert_ne!(a, 0);
    }

    #[test]
    fn test_timers_carry_the_current_owner() {
        let mut queue = TimerQueue::new();
        let unowned = queue.schedule(Duration::ZERO, TimerTask::Script);
        assert_eq!(queue.set_owner(Some(7)), None);
        let owned = queue.schedule(Duration::ZERO, TimerTask::Script);
        assert_eq!(queue.set_owner(None), Some(7));

        let horizon = Instant::now() + Duration::from_secs(1);
        let first = queue.pop_due(horizon).unwrap();
        let second = queue.pop_due(horizon).unwrap();
        assert_eq!((first.id, first.owner), (unowned, None));
        assert_eq!((second.id, second.owner), (owned, Some(7)));
    }

    #[test]
    fn test_clear_closes_signals() {
        let mut queue = TimerQueue::new();
        let (tx, mut rx) = oneshot::channel();
        queue.schedule(Duration::from_secs(5), TimerTask::Signal(tx));
        queue.schedule(Duration::from_secs(5), TimerTask::Script);
        assert_eq!(queue.clear(), 2);
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
        assert_eq!(queue.next_due(), None);
    }
}
