//! Internal implementation details.

pub(crate) mod release_bag;

pub(crate) use release_bag::ReleaseBag;
