pub mod migration_wizard;
pub mod notifications;
pub mod schedule_list;

/// Mount counter for a view. Every mount or unmount moves it forward, so a
/// request started under an older generation can be recognised and dropped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}
