// ABOUTME: Compile-fail test verifying engine traits cannot be implemented outside the crate.
// ABOUTME: The sealed supertrait is not nameable from here.

use kagglelab::runtime::{RuntimeInfo, RuntimeInfoError, RuntimeMetadata};

struct MyRuntime;

#[async_trait::async_trait]
impl RuntimeInfo for MyRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        unimplemented!()
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        Ok(())
    }
}

fn main() {}
