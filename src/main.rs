fn main() -> std::process::ExitCode {
    vita_launcher_lib::run()
}
