use std::sync::Arc;

use easy_ext::ext;

#[ext(ArcExt)]
pub impl<T: ?Sized> Arc<T> {
    /// Like [`Arc::clone`], but callable in method position without being
    /// shadowed by `T::clone`.
    fn clone_arc(&self) -> Self {
        Self::clone(self)
    }
}

#[ext(CopyExt)]
pub impl<T: Copy> T {
    /// Updates a copy of `self` with `mutator` and returns it.
    fn mutated(self, mutator: impl FnOnce(&mut Self)) -> Self {
        let mut copy = self;
        mutator(&mut copy);
        copy
    }
}

#[ext(DefaultExt)]
pub impl<T: Default + PartialEq> T {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
