//! Survey services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the form state machine and the aggregation math so
//! route handlers can stay focused on protocol translation and auth plumbing.
//! Both talk to storage only through `Arc<dyn SurveyStore>`.

pub mod dashboard;
pub mod forms;
pub mod survey_form;
