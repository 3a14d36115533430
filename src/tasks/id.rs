use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Stable identifier of one subroutine under test (e.g. `"Stack.push(I)V"`).
///
/// Cheap to clone; used as the key of [`BatchResult`](crate::BatchResult).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubroutineId(Arc<str>);

impl SubroutineId {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn as_arc(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }
}

impl fmt::Display for SubroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SubroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl From<&str> for SubroutineId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SubroutineId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Borrow<str> for SubroutineId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
