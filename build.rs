fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::compile_protos("proto/capture.proto")?;
    println!("cargo:rerun-if-changed=proto/capture.proto");
    Ok(())
}
