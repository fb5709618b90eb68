fn main() {
    load_env_config();

    linker_be_nice();
    // make sure linkall.x is the last linker script
    println!("cargo:rustc-link-arg=-Tlinkall.x");
}

/// Wi-Fi credentials and the broker address, from the environment or `.env`.
/// Environment variables take priority over `.env` values.
fn load_env_config() {
    use std::env;
    use std::path::Path;

    println!("cargo:rerun-if-changed=.env");
    for key in ["WIFI_SSID", "WIFI_PASSWORD", "MQTT_BROKER"] {
        println!("cargo:rerun-if-env-changed={}", key);
    }

    if Path::new(".env").exists() {
        match dotenvy::dotenv() {
            Ok(_) => println!("cargo:warning=Loaded .env file"),
            Err(e) => println!("cargo:warning=Failed to load .env file: {}", e),
        }
    }

    let read = |key: &str| env::var(key).unwrap_or_default().trim().to_string();

    let wifi_ssid = read("WIFI_SSID");
    let wifi_password = read("WIFI_PASSWORD");
    let mut mqtt_broker = read("MQTT_BROKER");
    if mqtt_broker.is_empty() {
        mqtt_broker = "192.168.1.138".to_string();
    }

    println!("cargo:rustc-env=WIFI_SSID={}", wifi_ssid);
    println!("cargo:rustc-env=WIFI_PASSWORD={}", wifi_password);
    println!("cargo:rustc-env=MQTT_BROKER={}", mqtt_broker);

    if wifi_ssid.is_empty() {
        println!("cargo:warning=WIFI_SSID is empty - the device will fail Wi-Fi setup");
    } else {
        println!("cargo:warning=WIFI_SSID configured: {}", wifi_ssid);
    }
    println!("cargo:warning=MQTT broker: {}", mqtt_broker);
}

fn linker_be_nice() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        let kind = &args[1];
        let what = &args[2];

        match kind.as_str() {
            "undefined-symbol" => match what.as_str() {
                "_stack_start" => {
                    eprintln!();
                    eprintln!("💡 Is the linker script `linkall.x` missing?");
                    eprintln!();
                }
                "esp_rtos_initialized" | "esp_rtos_yield_task" | "esp_rtos_task_create" => {
                    eprintln!();
                    eprintln!(
                        "💡 `esp-radio` has no scheduler enabled. Make sure `esp_rtos::start` is called before using the radio."
                    );
                    eprintln!();
                }
                _ => (),
            },
            // we don't have anything helpful for "missing-lib" yet
            _ => {
                std::process::exit(1);
            }
        }

        std::process::exit(0);
    }

    println!(
        "cargo:rustc-link-arg=--error-handling-script={}",
        std::env::current_exe().unwrap().display()
    );
}
