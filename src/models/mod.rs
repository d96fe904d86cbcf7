pub mod department;
pub mod document;
pub mod document_type;
pub mod loaders;

pub use department::Department;
pub use document::{CloudStatus, Document, DocumentStatus, StatusTransitionError};
pub use document_type::{DocumentType, DocumentTypeRegistry};
pub use loaders::{load_departments, save_departments};
