fn main() -> anyhow::Result<()> {
    eunoia_lib::run()
}
