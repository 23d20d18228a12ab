pub mod comparison;
pub mod content;
pub mod reader;
pub mod vfs;

pub use comparison::{Comparison, ComparisonEngine};
pub use content::ContentComparator;
pub use reader::TreeReader;
pub use vfs::LocalVfs;
