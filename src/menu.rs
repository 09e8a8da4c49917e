use std::io::{BufRead, Write};

/// Options of the interactive detection menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    /// Test one image, given as a path or URL.
    Image(String),
    Camera,
    /// Test every image in a directory.
    Directory(String),
}

pub const MENU_TEXT: &str = "=== Haar Cascade Classifier Test ===
1. Test an image (path or URL)
2. Use the camera
3. Test a folder of images";

/// Read the menu selection and, where needed, the path that goes with it.
///
/// Returns `None` for an unknown option or an empty path.
pub fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> anyhow::Result<Option<MenuChoice>> {
    writeln!(output, "{}", MENU_TEXT)?;
    let choice = ask(input, output, "Choose an option (1/2/3): ")?;

    let selected = match choice.as_str() {
        "1" => {
            let path = ask(input, output, "Image path or URL: ")?;
            (!path.is_empty()).then_some(MenuChoice::Image(path))
        }
        "2" => Some(MenuChoice::Camera),
        "3" => {
            let path = ask(input, output, "Folder path: ")?;
            (!path.is_empty()).then_some(MenuChoice::Directory(path))
        }
        _ => None,
    };

    if selected.is_none() {
        writeln!(output, "Invalid option.")?;
    }
    Ok(selected)
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> anyhow::Result<String> {
    write!(output, "{}", question)?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
