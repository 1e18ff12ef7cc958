// The forwarded-header contract between the gateway and the media service:
// every hop appends, the leftmost entry stays authoritative, and resolved
// media links always point at the address the client actually used.
#[cfg(test)]
mod test {
    use http::{HeaderMap, HeaderValue, header};
    use mediagate::core::{
        ForwardedContext, Scheme, UrlResolver,
        forwarded::{extend_chain, observed_host},
    };

    fn inbound_headers(host: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_str(host).unwrap());
        headers
    }

    #[test]
    fn lan_client_gets_lan_links() {
        // Phone on the LAN hits the gateway directly.
        let headers = inbound_headers("192.168.1.50:3000");
        let ctx = ForwardedContext::from_request(&headers, None, Scheme::Http);

        let resolver = UrlResolver::from_base_str("http://localhost:3000").unwrap();
        assert_eq!(
            resolver.resolve("media/image/photo.jpg", Some(&ctx)),
            "http://192.168.1.50:3000/media/image/photo.jpg"
        );
    }

    #[test]
    fn chained_proxy_keeps_original_client_host() {
        // The gateway sits behind another reverse proxy: the media service
        // receives a chain and must resolve against its first entry, not
        // the gateway's own 127.0.0.1 hop.
        let mut headers = inbound_headers("10.0.0.9");
        let peer = "10.0.0.2:40000".parse().unwrap();

        // First hop (outer proxy) stamps the chain...
        let this_hop = observed_host(&headers, None);
        extend_chain(&mut headers, &this_hop, Scheme::Http, Some(peer));

        // ...second hop (the gateway) observes a different host and appends.
        headers.insert(header::HOST, HeaderValue::from_static("127.0.0.1:3000"));
        let gateway_hop = observed_host(&headers, None);
        extend_chain(&mut headers, &gateway_hop, Scheme::Http, None);

        assert_eq!(
            headers.get("x-forwarded-host").unwrap(),
            "10.0.0.9, 127.0.0.1:3000"
        );

        // What the media service then derives:
        let ctx = ForwardedContext::from_request(&headers, None, Scheme::Http);
        assert_eq!(ctx.host(), "10.0.0.9");
        assert_eq!(ctx.hop_count(), 2);

        let resolver = UrlResolver::from_base_str("http://localhost:8001").unwrap();
        assert_eq!(
            resolver.resolve("media/image/photo.jpg", Some(&ctx)),
            "http://10.0.0.9/media/image/photo.jpg"
        );
    }

    #[test]
    fn resolution_is_stable_across_calls() {
        let headers = inbound_headers("worknomads.local:3000");
        let ctx = ForwardedContext::from_request(&headers, None, Scheme::Http);
        let resolver = UrlResolver::from_base_str("http://localhost:3000").unwrap();

        let first = resolver.resolve("media/video/clip.mp4", Some(&ctx));
        let second = resolver.resolve("media/video/clip.mp4", Some(&ctx));
        assert_eq!(first, second);
        assert_eq!(first, "http://worknomads.local:3000/media/video/clip.mp4");
    }

    #[test]
    fn context_is_never_fabricated() {
        // No forwarded chain, no Host header: the builder degrades to the
        // socket address, and a missing context falls back to the
        // configured base URL.
        let headers = HeaderMap::new();
        let local = "0.0.0.0:3000".parse().unwrap();
        let ctx = ForwardedContext::from_request(&headers, Some(local), Scheme::Http);
        assert_eq!(ctx.host(), "0.0.0.0");

        let resolver = UrlResolver::from_base_str("http://media.internal:8001").unwrap();
        assert_eq!(
            resolver.resolve("media/audio/track.ogg", None),
            "http://media.internal:8001/media/audio/track.ogg"
        );
    }

    #[test]
    fn https_edge_survives_the_chain() {
        // TLS terminates at an outer proxy; the scheme must survive to the
        // resolved link even though every internal hop speaks plain HTTP.
        let mut headers = inbound_headers("media.example.com");
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert(
            "x-forwarded-host",
            HeaderValue::from_static("media.example.com"),
        );

        let ctx = ForwardedContext::from_request(&headers, None, Scheme::Http);
        let resolver = UrlResolver::from_base_str("http://localhost:8001").unwrap();
        assert_eq!(
            resolver.resolve("media/image/cover.png", Some(&ctx)),
            "https://media.example.com/media/image/cover.png"
        );
    }
}
