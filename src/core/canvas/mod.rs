pub mod canvas_models;
pub mod canvas_service;
pub mod export_archive;
pub mod export_cache;

pub use canvas_models::{
    Assignment, CalendarEventQuery, CanvasUser, Course, CourseContent, UpcomingAssignment,
};
pub use canvas_service::{
    filter_current_term, upcoming_from, AssignmentHarvest, CanvasApi, CanvasError,
    CanvasService, ExportPolling,
};
pub use export_cache::ExportCache;
