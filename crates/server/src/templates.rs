use rust_embed::RustEmbed;
use tera::Tera;

#[derive(RustEmbed)]
#[folder = "templates/"]
struct PageTemplates;

/// Builds a [`Tera`] instance from the templates compiled into the binary.
pub fn load_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    for name in PageTemplates::iter() {
        let file = PageTemplates::get(&name)
            .ok_or_else(|| tera::Error::msg(format!("embedded template '{name}' disappeared")))?;
        let source = std::str::from_utf8(&file.data)
            .map_err(|e| tera::Error::msg(format!("template '{name}' is not UTF-8: {e}")))?;
        tera.add_raw_template(&name, source)?;
    }
    Ok(tera)
}
