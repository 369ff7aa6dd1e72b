// ABOUTME: Compile-fail test verifying a pipeline cannot be used after debug().
// ABOUTME: Terminal operations take the pipeline by value.

use kagglelab::pipeline::{HostDir, Pipeline};

fn main() {
    let work = HostDir::new(".").unwrap();
    let pipeline = Pipeline::new(work);
    let _shell = pipeline.debug();
    let _again = pipeline.with_workdir("/tmp"); // ERROR: use of moved value
}
