pub mod api_handler;
pub mod builtin_operations;
pub mod command_operation;
pub mod gemini_responder;
pub mod health_handler;
pub mod metrics_handler;
pub mod operation_handler;
pub mod operation_registry;
pub mod structure_preview;
pub mod ui_handler;
