use parallel_worker::{optional, pool::CONCURRENCY_ENV, Config, WorkerPool};
use tokio::runtime::Builder;
use tracing_subscriber::EnvFilter;


/// Функция, выполняющая какую-либо полезную работу в нескольких задачах
fn some_work_to_do(x: Option<i64>) -> Option<i64> {
    x.map(|x| x * 2)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let rt = Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()?;

    rt.block_on(async {
        let mut config = Config::from_env()?;
        if std::env::var(CONCURRENCY_ENV).is_err() {
            config.concurrency_limit = 5;
        }
        let pool = WorkerPool::with_config(config)?;

        let tasks_list: Vec<i64> = (0..50).collect();
        let result = pool.start(optional(some_work_to_do), tasks_list).await;

        for (key, value) in result.iter() {
            match value {
                Some(v) => println!("{} :: {}", key, v),
                None => println!("{} :: None", key),
            }
        }
        for (key, err) in result.failures() {
            println!("{} :: error: {}", key, err);
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
