use axum::response::Html;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="ja">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Product Scraper</title>
  <style>
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f5f7fa; margin: 0; padding: 32px; }
    main { max-width: 720px; margin: 0 auto; }
    section { background: #fff; border-radius: 12px; padding: 24px; margin-bottom: 20px; box-shadow: 0 2px 8px rgba(0,0,0,0.05); }
    input, textarea { width: 100%; box-sizing: border-box; padding: 10px; margin-bottom: 12px; border: 1px solid #d0d5dd; border-radius: 8px; }
    textarea { min-height: 160px; font-family: monospace; }
    button, a.button { background: #667eea; color: #fff; border: 0; padding: 10px 24px; border-radius: 8px; text-decoration: none; cursor: pointer; }
    #status { min-height: 1.5em; }
    .error { color: #c0392b; }
    table { width: 100%; border-collapse: collapse; margin-top: 12px; }
    td, th { text-align: left; padding: 6px; border-bottom: 1px solid #eee; font-size: 14px; }
  </style>
</head>
<body>
<main>
  <h1>Product Scraper</h1>
  <section>
    <h2>1. Login</h2>
    <form id="login-form" method="post" action="/login">
      <input name="username" placeholder="username" autocomplete="username" required>
      <input name="password" type="password" placeholder="password" autocomplete="current-password" required>
      <button type="submit">Login</button>
    </form>
  </section>
  <section>
    <h2>2. Scrape</h2>
    <form id="scrape-form" method="post" action="/scrape">
      <textarea name="urls" placeholder="https://www.shopify-store.com/products/example-product&#10;https://www.brand-website.com/shop/cool-item"></textarea>
      <button type="submit">Scrape Products</button>
    </form>
  </section>
  <section>
    <h2>3. Results</h2>
    <p id="status"></p>
    <table>
      <thead><tr><th>Name</th><th>Price</th><th>URL</th></tr></thead>
      <tbody id="results"></tbody>
    </table>
    <p><a class="button" href="/export">Download XLSX</a></p>
  </section>
</main>
<script>
  const statusLine = document.getElementById('status');

  function show(message, isError) {
    statusLine.textContent = message;
    statusLine.className = isError ? 'error' : '';
  }

  async function post(form) {
    const response = await fetch(form.action, {
      method: 'POST',
      body: new URLSearchParams(new FormData(form)),
    });
    const body = await response.json().catch(() => ({}));
    if (!response.ok) {
      throw new Error(body.message || response.statusText);
    }
    return body;
  }

  function addRow(cells) {
    const row = document.createElement('tr');
    for (const value of cells) {
      const cell = document.createElement('td');
      cell.textContent = value;
      row.appendChild(cell);
    }
    document.getElementById('results').appendChild(row);
  }

  document.getElementById('login-form').addEventListener('submit', async (event) => {
    event.preventDefault();
    try {
      const body = await post(event.target);
      show('Logged in as ' + body.username, false);
    } catch (err) {
      show('Login failed: ' + err.message, true);
    }
  });

  document.getElementById('scrape-form').addEventListener('submit', async (event) => {
    event.preventDefault();
    show('Scraping...', false);
    try {
      const body = await post(event.target);
      for (const record of body.records) {
        addRow([record.name, record.price || '', record.source_url]);
      }
      for (const failure of body.failures) {
        addRow(['(' + failure.kind + ') ' + failure.message, '', failure.url]);
      }
      show(body.records.length + ' scraped, ' + body.failures.length + ' failed, '
        + body.buffered + ' ready to download', false);
    } catch (err) {
      show('Scrape failed: ' + err.message, true);
    }
  });
</script>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
