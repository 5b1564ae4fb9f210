fn main() {
    println!("cargo:rerun-if-changed=proto/coded.proto");
    tonic_prost_build::configure()
        .compile_protos(&["proto/coded.proto"], &["proto/"])
        .expect("Failed to compile proto/coded.proto");
}
