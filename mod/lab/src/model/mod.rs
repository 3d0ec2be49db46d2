mod batch;
mod certificate;
mod measurement;
mod product;

pub use batch::{make_reference_no, OutOfRangeEntry, StationGroup, TestBatch};
pub use certificate::{Certificate, CertificateLine, CertificateStatus};
pub use measurement::{MeasurementKey, Station};
pub use product::{CreateProduct, Product, ProductSpecification};
