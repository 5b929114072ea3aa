pub mod chat;
pub mod operation_form;
pub mod results;
pub mod sidebar;
pub mod visualizer;
pub mod widgets;
