use anyhow::Result;

fn main() -> Result<()> {
    tagclass_cli::main_entry()
}
