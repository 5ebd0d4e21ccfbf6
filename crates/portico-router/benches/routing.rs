//! Routing benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use http::Method;
use portico_core::{handler_fn, Context};
use portico_router::Router;

async fn noop(_ctx: &mut Context) {}

fn build_router() -> Router {
    let router = Router::new();
    for i in 0..50 {
        router.add_route(
            Method::GET,
            &format!("/static/route{i}"),
            vec![handler_fn(noop)],
        );
    }
    router.add_route(Method::GET, "/users/:id", vec![handler_fn(noop)]);
    router.add_route(Method::GET, "/users/:id/posts/:post", vec![handler_fn(noop)]);
    router.add_route(Method::GET, "/files/*path", vec![handler_fn(noop)]);
    router
}

fn bench_routing(c: &mut Criterion) {
    let table = build_router().freeze();

    c.bench_function("match_static", |b| {
        b.iter(|| table.find(&Method::GET, black_box("/static/route25")));
    });

    c.bench_function("match_param", |b| {
        b.iter(|| table.find(&Method::GET, black_box("/users/12345")));
    });

    c.bench_function("match_two_params", |b| {
        b.iter(|| table.find(&Method::GET, black_box("/users/12345/posts/99")));
    });

    c.bench_function("match_wildcard", |b| {
        b.iter(|| table.find(&Method::GET, black_box("/files/css/app.css")));
    });

    c.bench_function("match_miss", |b| {
        b.iter(|| table.find(&Method::GET, black_box("/nope/nothing/here")));
    });
}

criterion_group!(benches, bench_routing);
criterion_main!(benches);
