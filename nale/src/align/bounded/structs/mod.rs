pub mod bound;
pub mod cloud_bound_group;
pub mod cloud_matrix;
pub mod cloud_search_params;
pub mod dp_matrix_sparse;
pub mod edgebounds;
pub mod row_bounds;
pub mod seed;

pub use bound::Bound;
pub use cloud_bound_group::CloudBoundGroup;
pub use cloud_matrix::{CloudMatrixLinear, DELETE, INSERT, MATCH, NUM_STATES};
pub use cloud_search_params::{CloudSearchParams, DomainThresholds};
pub use dp_matrix_sparse::DpMatrixSparse;
pub use edgebounds::{reorient_diag_to_row, union, Edgebounds, Orientation};
pub use row_bounds::RowBounds;
pub use seed::Seed;
