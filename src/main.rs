use ephemeral_relay::rocket;

#[rocket::main]
async fn main() {
    env_logger::init();
    println!("ephemeral-relay starting");

    if let Err(e) = rocket().launch().await {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}
