use syncprobe::error::AppResult;

fn main() -> AppResult<()> {
    syncprobe::entry::run()
}
