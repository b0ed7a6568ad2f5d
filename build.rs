use std::error::Error;
use vergen_gitcl::{BuildBuilder, Emitter, GitclBuilder};

// Revision and build time end up in the debug banner of the binary
fn main() -> Result<(), Box<dyn Error>> {
    let build = BuildBuilder::default().build_timestamp(true).build()?;
    let git = GitclBuilder::default().sha(true).dirty(true).build()?;
    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&git)?
        .emit()?;
    Ok(())
}
