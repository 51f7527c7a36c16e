use focal::store::Project;
use focal::sync::Board;

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const STRIKETHROUGH: &str = "\x1b[9m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

const BAR_WIDTH: usize = 10;

fn progress_bar(percent: u8) -> String {
    let filled = (percent as usize * BAR_WIDTH) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        percent,
    )
}

fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// Horizontal rule between watch-mode refreshes
pub fn paint_rule(use_color: bool) -> String {
    paint(&"-".repeat(40), Color::GRAY, use_color)
}

/// Render the dashboard: totals plus one block per project, newest first.
pub fn dashboard(board: &Board, use_color: bool) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "{} project(s) · {} task(s) pending",
        board.projects().len(),
        board.pending_total(),
    ));
    lines.push(String::new());

    if board.projects().is_empty() {
        lines.push("The board is empty. Create a project with `focal-cli create <title>`.".to_string());
        return lines.join("\n");
    }

    for project in board.projects() {
        let badge = if project.is_complete() {
            format!(" {}", paint("[done]", Color::GREEN, use_color))
        } else {
            String::new()
        };
        lines.push(format!(
            "{}{}  {}",
            paint(&project.title, Color::BOLD, use_color),
            badge,
            paint(&project.id, Color::GRAY, use_color),
        ));
        if let Some(description) = &project.description {
            lines.push(format!("    {}", paint(description, Color::DIM, use_color)));
        }
        lines.push(format!(
            "    {}  {} pending",
            progress_bar(project.progress_percent()),
            project.pending_count(),
        ));
        lines.push(String::new());
    }

    while lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Render one project's detail view with its task list.
pub fn project_detail(project: &Project, use_color: bool) -> String {
    let mut lines = Vec::new();

    lines.push(paint(&project.title, Color::BOLD, use_color));
    if let Some(description) = &project.description {
        lines.push(paint(description, Color::DIM, use_color));
    }
    lines.push(progress_bar(project.progress_percent()));
    lines.push(String::new());

    if project.tasks.is_empty() {
        lines.push("No tasks yet.".to_string());
        return lines.join("\n");
    }

    for task in &project.tasks {
        let line = if task.completed {
            format!(
                "[x] {}  {}",
                paint(&task.text, Color::STRIKETHROUGH, use_color),
                paint(&task.id, Color::GRAY, use_color),
            )
        } else {
            format!(
                "[ ] {}  {}",
                task.text,
                paint(&task.id, Color::GRAY, use_color),
            )
        };
        lines.push(line);
    }

    lines.join("\n")
}
