//! Built-in HTML pages served by the framework itself.
//!
//! These cover the default not-found response, upstream failure pages
//! emitted by the SPA proxy, and the GraphQL playground shell.

use http::StatusCode;

/// Renders the default 404 page installed as the router's terminal
/// not-found handler.
#[must_use]
pub fn not_found_page() -> String {
    "<!DOCTYPE html>\n\
     <html>\n\
     <head><title>404 Page Not Found</title></head>\n\
     <body>\n\
     <h1>Page Not Found</h1>\n\
     <p>The page you were looking for doesn't exist.</p>\n\
     </body>\n\
     </html>\n"
        .to_owned()
}

/// Renders a generic error page for the given status.
///
/// The title follows the `<code> <canonical reason>` shape so tests and
/// monitoring can match on it.
#[must_use]
pub fn error_page(status: StatusCode, message: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("Error");
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><title>{code} {reason}</title></head>\n\
         <body>\n\
         <h1>{reason}</h1>\n\
         <p>{message}</p>\n\
         </body>\n\
         </html>\n",
        code = status.as_u16(),
    )
}

/// Renders the GraphQL playground shell pointed at `endpoint`.
///
/// The subscription endpoint is derived from `window.location` in the
/// page itself so the same HTML works over both http and https.
#[must_use]
pub fn playground_page(endpoint: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="user-scalable=no, initial-scale=1.0, minimum-scale=1.0, maximum-scale=1.0, minimal-ui" />
  <title>GraphQL Playground</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/graphql-playground-react/build/static/css/index.css" />
  <link rel="shortcut icon" href="https://cdn.jsdelivr.net/npm/graphql-playground-react/build/favicon.png" />
  <script src="https://cdn.jsdelivr.net/npm/graphql-playground-react/build/static/js/middleware.js"></script>
</head>
<body>
  <div id="root"></div>
  <script>
    window.addEventListener('load', function () {{
      var wsProto = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
      GraphQLPlayground.init(document.getElementById('root'), {{
        endpoint: '{endpoint}',
        subscriptionEndpoint: wsProto + '//' + window.location.host + '{endpoint}',
        settings: {{
          'request.credentials': 'include'
        }}
      }});
    }});
  </script>
</body>
</html>
"#
    )
}
