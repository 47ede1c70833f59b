pub mod optim;

pub use optim::{create_merge_func_pass, Pass, PassRunner};
