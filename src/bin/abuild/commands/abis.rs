//! `abuild abis` command

use anyhow::Result;

use abuild::core::ArchTable;

pub fn execute() -> Result<()> {
    let table = ArchTable::bundled()?;

    for arch in table.archs() {
        let abis: Vec<&str> = arch.abis.iter().map(|a| a.name.as_str()).collect();
        println!("{:<8} {}", arch.name, abis.join(", "));
    }

    Ok(())
}
