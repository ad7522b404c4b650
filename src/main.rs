use anyhow::Result;
use salmon_rules::uci::UciHandler;

fn main() -> Result<()> {
    let mut uci = UciHandler::new();
    uci.run()
}
