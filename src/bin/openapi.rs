use anyhow::Result;

// Print the OpenAPI document, used to generate frontend clients.
fn main() -> Result<()> {
    let doc = pawgram::api::openapi();
    let json = serde_json::to_string_pretty(&doc)?;
    println!("{json}");
    Ok(())
}
