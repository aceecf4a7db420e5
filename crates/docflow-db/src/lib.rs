pub mod db;

pub use db::{GdprResultRepository, ProcessingRepository, SharingRepository};
