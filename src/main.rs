use anyhow::Result;

fn main() -> Result<()> {
    cookbook_tui::cli::run()
}
