/*!
 * Presentation Module
 * Console output for reports and interactive deadlock resolution
 */

pub mod console;
pub mod report;

pub use console::ConsoleResolver;
pub use report::{
    average_turnaround, format_action, render_actions, render_process_table, render_report,
    render_resources, render_summary, to_json,
};
