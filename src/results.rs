mod row;

pub use row::ResultRow;
