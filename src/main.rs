fn main() -> anyhow::Result<()> {
    tou_chat_lib::run()
}
