//! Employee administration commands.

use std::fmt::Write;

use anyhow::Result;
use parlor_core::Employee;
use parlor_db::Facade;

/// Register a new employee and print its ID.
pub fn add(facade: &mut Facade, name: &str) -> Result<()> {
    let employee = facade.add_employee(name)?;
    println!("{}", employee.id.as_str());
    Ok(())
}

/// Change an employee's display name.
pub fn rename(facade: &mut Facade, id: &str, name: &str) -> Result<()> {
    let employee = facade.rename_employee(id, name)?;
    println!("{} renamed to {}", employee.id.as_str(), employee.name);
    Ok(())
}

/// Format employees for human-readable output.
pub fn format_employees(employees: &[Employee]) -> String {
    let mut output = String::new();

    if employees.is_empty() {
        writeln!(output, "No employees registered.").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: Run 'parlor employee add <name>' to register one.").unwrap();
        return output;
    }

    writeln!(output, "{:<36}  Name", "ID").unwrap();
    writeln!(
        output,
        "────────────────────────────────────  ──────────────────────"
    )
    .unwrap();
    for employee in employees {
        writeln!(output, "{:<36}  {}", employee.id.as_str(), employee.name).unwrap();
    }

    output
}

/// Runs the employee list command.
pub fn list(facade: &Facade, json: bool) -> Result<()> {
    let employees = facade.list_employees()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&employees)?);
    } else {
        print!("{}", format_employees(&employees));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use parlor_core::EmployeeId;

    use super::*;

    fn employee(id: &str, name: &str) -> Employee {
        Employee {
            id: EmployeeId::new(id).unwrap(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_format_employees_empty() {
        let output = format_employees(&[]);
        assert!(output.contains("No employees registered."));
        assert!(output.contains("parlor employee add"));
    }

    #[test]
    fn test_format_employees_table() {
        let employees = vec![
            employee("6fa459ea-ee8a-3ca4-894e-db77e160355e", "Aiko"),
            employee("7c9e6679-7425-40de-944b-e07fc1f90ae7", "Benji"),
        ];
        let output = format_employees(&employees);
        assert!(output.contains("6fa459ea-ee8a-3ca4-894e-db77e160355e  Aiko"));
        assert!(output.contains("7c9e6679-7425-40de-944b-e07fc1f90ae7  Benji"));
    }
}
