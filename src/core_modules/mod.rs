pub mod bounding_box;
pub mod group_merger;
pub mod instance;
pub mod mask;
pub mod mask_merger;
pub mod matcher;
pub mod performance;
pub mod raster_labeler;
pub mod region_splitter;
pub mod undirected_graph;
