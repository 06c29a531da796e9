pub mod value;
pub mod scope;
pub mod arithmetic;
pub mod collection;
pub mod interpreter;
