mod slice_iter;

pub use slice_iter::Expected;
pub use slice_iter::SliceIter;
pub use slice_iter::TokenIter;
