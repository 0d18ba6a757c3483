use console::{Emoji, style};

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static INFO_ICON: Emoji<'_, '_> = Emoji("ℹ️  ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static GLOBE: Emoji<'_, '_> = Emoji("🌐 ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");

pub fn print_success(msg: &str) {
    println!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_info(msg: &str) {
    println!("{} {}", INFO_ICON, style(msg).blue());
}

pub fn print_warn(msg: &str) {
    println!("{} {}", WARN_ICON, style(msg).yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_status(label: &str, msg: &str) {
    println!("  {} {}: {}", GEAR, style(label).bold().cyan(), msg);
}

pub fn print_link(label: &str, url: &str) {
    println!(
        "  {} {}: {}",
        GLOBE,
        style(label).bold(),
        style(url).underlined().cyan()
    );
}

pub fn print_banner() {
    let lines: &[&str] = &[
        " _            _    _          _     _            ",
        "| |_ __ _ ___| | _| |__  _ __(_) __| | __ _  ___ ",
        "| __/ _` / __| |/ / '_ \\| '__| |/ _` |/ _` |/ _ \\",
        "| || (_| \\__ \\   <| |_) | |  | | (_| | (_| |  __/",
        " \\__\\__,_|___/_|\\_\\_.__/|_|  |_|\\__,_|\\__, |\\___|",
        "                                      |___/      ",
    ];
    for line in lines {
        println!("{}", style(line).cyan());
    }
}

/// Help-screen section: a titled group of command/description rows.
pub struct GuideSection {
    title: String,
    rows: Vec<(String, String)>,
}

impl GuideSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn command(mut self, cmd: &str, desc: &str) -> Self {
        self.rows.push((cmd.to_string(), desc.to_string()));
        self
    }

    pub fn print(self) {
        println!("\n {}", style(self.title).bold().underlined());
        for (cmd, desc) in self.rows {
            println!("   {:<12} {}", style(cmd).green(), desc);
        }
    }
}
