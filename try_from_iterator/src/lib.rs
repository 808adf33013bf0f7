/// Fallible counterpart to [`FromIterator`] for bounded collections.
pub trait TryFromIterator<T>: Sized {
    type Error;

    fn try_from_iter(items: impl IntoIterator<Item = T>) -> Result<Self, Self::Error>;
}
