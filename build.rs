use chrono::Utc;

fn main() {
    // 版本接口展示的构建时间 / build time shown by the version endpoint
    let build_time = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);

    println!("cargo:rerun-if-changed=build.rs");
}
