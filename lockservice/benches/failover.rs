use criterion::Criterion;
use criterion::{criterion_group, criterion_main};

use labrpc::tokio::runtime::Builder;
use lockservice::tests::{lock_cluster, PRIMARY};

const NOPS: u32 = 100;

fn bench_lock_unlock(c: &mut Criterion) {
    let _ = env_logger::try_init();

    for primary_down in [false, true].iter().copied() {
        let name = if primary_down {
            format!("{} lock/unlock pairs, primary down", NOPS)
        } else {
            format!("{} lock/unlock pairs", NOPS)
        };
        c.bench_function(&name, |b| {
            b.iter_custom(|iters| {
                let rt = Builder::new_multi_thread()
                    .worker_threads(4)
                    .enable_all()
                    .build()
                    .unwrap();

                rt.block_on(async {
                    let cluster = lock_cluster();
                    if primary_down {
                        cluster.net.disconnect(PRIMARY);
                    }
                    let mut client = cluster.client();

                    let start = labrpc::tokio::time::Instant::now();
                    for _ in 0..iters {
                        for i in 0..NOPS {
                            let name = format!("lock-{}", i);
                            assert_eq!(client.lock(&name).await, Ok(true));
                            assert_eq!(client.unlock(&name).await, Ok(true));
                        }
                    }
                    start.elapsed()
                })
            });
        });
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_lock_unlock,
);
criterion_main!(benches);
