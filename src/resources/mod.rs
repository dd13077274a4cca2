pub mod backend;
pub mod bucket;
pub mod object;
pub mod s3;
pub mod url;
