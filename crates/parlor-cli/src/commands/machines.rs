//! Machine administration commands.

use std::fmt::Write;

use anyhow::Result;
use parlor_core::Machine;
use parlor_db::Facade;

/// Register a new machine and print its ID.
pub fn add(facade: &mut Facade, name: &str) -> Result<()> {
    let machine = facade.add_machine(name)?;
    println!("{}", machine.id.as_str());
    Ok(())
}

/// Retire a machine. Its history stays queryable but no new sessions may open.
pub fn retire(facade: &mut Facade, id: &str) -> Result<()> {
    let machine = facade.retire_machine(id)?;
    println!("{} retired", machine.id.as_str());
    Ok(())
}

/// Return a retired machine to the floor.
pub fn restore(facade: &mut Facade, id: &str) -> Result<()> {
    let machine = facade.restore_machine(id)?;
    println!("{} restored", machine.id.as_str());
    Ok(())
}

/// Format machines for human-readable output.
pub fn format_machines(machines: &[Machine]) -> String {
    let mut output = String::new();

    if machines.is_empty() {
        writeln!(output, "No machines registered.").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: Run 'parlor machine add <name>' to register one.").unwrap();
        return output;
    }

    writeln!(output, "{:<36}  {:<22}  Status", "ID", "Name").unwrap();
    writeln!(
        output,
        "────────────────────────────────────  ──────────────────────  ───────"
    )
    .unwrap();
    for machine in machines {
        writeln!(
            output,
            "{:<36}  {:<22}  {}",
            machine.id.as_str(),
            machine.name,
            machine.status.as_str()
        )
        .unwrap();
    }

    output
}

/// Runs the machine list command.
pub fn list(facade: &Facade, json: bool) -> Result<()> {
    let machines = facade.list_machines()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&machines)?);
    } else {
        print!("{}", format_machines(&machines));
    }

    Ok(())
}
