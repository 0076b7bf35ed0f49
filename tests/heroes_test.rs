//! Fetches a villain for every hero over a simulated network, recovering from
//! failed requests, and checks that results keep the heroes' order even
//! though replies arrive out of order.
#[cfg(test)]
mod tests {
    use belief::{Belief, Config, Item, Schedule, TickQueue};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::EnvFilter;

    #[derive(Debug, Clone, PartialEq)]
    struct Hero {
        id: u32,
        name: &'static str,
        villain: Option<String>,
    }

    #[derive(Debug, Clone)]
    struct Villain {
        hero_id: u32,
        name: &'static str,
    }

    static VILLAINS: [Villain; 4] = [
        Villain { hero_id: 1, name: "The Joker" },
        Villain { hero_id: 2, name: "Green Goblin" },
        Villain { hero_id: 3, name: "Loki" },
        Villain { hero_id: 4, name: "Zod" },
    ];

    fn heroes() -> Vec<Hero> {
        [(1, "Batman"), (2, "Spiderman"), (3, "Thor"), (4, "Superman")]
            .into_iter()
            .map(|(id, name)| Hero { id, name, villain: None })
            .collect()
    }

    /// A fake network whose replies arrive after a per-hero number of ticks.
    #[derive(Clone)]
    struct Network {
        ticks: TickQueue,
        config: Config,
        arrivals: Arc<Mutex<Vec<u32>>>,
    }

    impl Network {
        fn new() -> Self {
            let ticks = TickQueue::new();
            Self {
                config: Config::new().scheduler(ticks.clone()),
                ticks,
                arrivals: Arc::default(),
            }
        }

        fn latency(hero_id: u32) -> usize {
            match hero_id {
                1 => 6,
                2 => 0,
                3 => 3,
                _ => 1,
            }
        }

        fn fetch_villain(&self, hero_id: u32) -> Belief<Villain, String> {
            let ticks = self.ticks.clone();
            let arrivals = self.arrivals.clone();
            self.config.belief(move |settler| {
                after(&ticks, Network::latency(hero_id), move || {
                    arrivals.lock().unwrap().push(hero_id);
                    if hero_id == 4 {
                        settler.reject(String::from("Network error"));
                        return;
                    }
                    match VILLAINS.iter().find(|v| v.hero_id == hero_id) {
                        Some(villain) => settler.resolve(villain.clone()),
                        None => settler.reject(format!("no villain for hero {hero_id}")),
                    }
                });
            })
        }
    }

    /// Runs `job` after `delay` extra ticks.
    fn after(ticks: &TickQueue, delay: usize, job: impl FnOnce() + Send + 'static) {
        if delay == 0 {
            ticks.schedule(Box::new(job));
        } else {
            let next = ticks.clone();
            ticks.schedule(Box::new(move || after(&next, delay - 1, job)));
        }
    }

    #[test]
    fn real_world() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let network = Network::new();
        let fetcher = network.clone();
        let with_villains = network
            .config
            .resolve::<Vec<Hero>, String>(heroes())
            .map(move |mut hero| {
                tracing::info!(hero = hero.name, "fetching villain");
                let mut fallback = hero.clone();
                let found = fetcher.fetch_villain(hero.id).and_then(move |villain| {
                    tracing::info!(hero = hero.name, villain = villain.name, "villain found");
                    hero.villain = Some(villain.name.to_string());
                    Ok(Item::Plain(hero))
                });
                let recovered = found.catch(move |err| {
                    tracing::info!(hero = fallback.name, %err, "request failed");
                    fallback.villain = Some(err);
                    Ok(Item::Plain(fallback))
                });
                Ok(Item::from(recovered))
            });

        network.ticks.run_until_idle();

        let expected = vec![
            Hero { id: 1, name: "Batman", villain: Some("The Joker".into()) },
            Hero { id: 2, name: "Spiderman", villain: Some("Green Goblin".into()) },
            Hero { id: 3, name: "Thor", villain: Some("Loki".into()) },
            Hero { id: 4, name: "Superman", villain: Some("Network error".into()) },
        ];
        assert_eq!(with_villains.peek(), Some(Ok(expected)));
        assert_eq!(*network.arrivals.lock().unwrap(), vec![2, 4, 3, 1]);
    }

    #[test]
    fn unrecovered_failure_rejects_the_whole_batch() {
        let network = Network::new();
        let fetcher = network.clone();
        let names = network
            .config
            .resolve::<Vec<Hero>, String>(heroes())
            .map(move |hero| {
                let found = fetcher.fetch_villain(hero.id);
                Ok(Item::from(found.and_then(|villain| Ok(Item::Plain(villain.name)))))
            });

        network.ticks.run_until_idle();

        assert_eq!(names.peek(), Some(Err(String::from("Network error"))));
        // Slower requests still ran to completion after the batch failed.
        assert_eq!(network.arrivals.lock().unwrap().len(), 4);
    }
}
